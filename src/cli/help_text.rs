pub(super) const ROOT_LONG_ABOUT: &str = "\
Multithreaded file consistency checker

Phantom walks a directory tree with a pool of worker threads and computes a
digest of every regular file it finds. Symbolic links are never followed and
special files (devices, FIFOs, sockets) are ignored.

MODES:

  Hash mode (default):
    Prints one line per regular file:

      <algorithm> , <path> , <digest>

    Redirect this output to a file to keep it as a reference for later runs.

  Compare mode (--compare REFERENCE_FILE):
    Reads the output of a previous run and prints only what has changed:

      hash differs : <path> found(<digest>) expected(<digest>)
      extra file : <path> with hash(<digest>)
      file disappeared: <path>

    Files whose digest matches the reference produce no output. Disappeared
    files are listed after every other result line. Use the same digest
    algorithm the reference was recorded with.

TYPICAL WORKFLOW:

  1. Record the current state of a tree:
     $ phantom -n 8 /srv/data > data.ref

  2. Later, check what changed since then:
     $ phantom -n 8 --compare data.ref /srv/data

  3. Add timing and throughput figures to any run. The report is printed
     on stderr, so the redirected output stays a valid reference:
     $ phantom -n 8 -s /srv/data > data.ref

Paths in the output are formed by joining the root as given with the entry
names below it, so compare runs must use the same spelling of the root as
the run that produced the reference. Path bytes are written unchanged, even
when they are not valid UTF-8.

Unreadable files and directories are reported as warnings on stderr and
skipped; the run continues.

EXIT CODES:

  0    Success (in compare mode: no differences)
  1    Compare mode found differing, extra or disappeared files
  2    Invalid command line
  255  Other errors (unreadable root, missing or malformed reference file)
";
